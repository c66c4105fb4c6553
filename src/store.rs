//! JSON file store
//!
//! A single worker task owns the data file. Every request reloads the
//! document, applies one closure and writes it back through a temporary
//! file and an atomic rename, so handlers never interleave their
//! read-modify-write cycles and a failed write leaves the old file intact.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::{
  fs,
  sync::{mpsc, oneshot},
};
use uuid::Uuid;

use crate::{entity::Document, prelude::*};

const QUEUE_SIZE: usize = 64;

type Job = Box<dyn FnOnce(&mut Document) -> bool + Send>;

struct Request {
  job: Job,
  ack: oneshot::Sender<Result<()>>,
}

/// Result of a store closure and whether the document must be written back.
pub struct Tx<T> {
  value: T,
  dirty: bool,
}

impl<T> Tx<T> {
  pub fn keep(value: T) -> Self {
    Self { value, dirty: false }
  }

  pub fn save(value: T) -> Self {
    Self { value, dirty: true }
  }
}

#[derive(Clone)]
pub struct Store {
  tx: mpsc::Sender<Request>,
  path: PathBuf,
}

impl Store {
  /// Spawns the worker; must be called inside a tokio runtime.
  pub fn open(path: impl Into<PathBuf>) -> Self {
    let path = path.into();
    let (tx, rx) = mpsc::channel(QUEUE_SIZE);

    tokio::spawn(worker(path.clone(), rx));

    Self { tx, path }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub async fn read<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Document) -> T + Send + 'static,
    T: Send + 'static,
  {
    self.transact(move |doc| Tx::keep(f(&*doc))).await
  }

  pub async fn transact<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut Document) -> Tx<T> + Send + 'static,
    T: Send + 'static,
  {
    let (value_tx, value_rx) = oneshot::channel();
    let job: Job = Box::new(move |doc: &mut Document| {
      let Tx { value, dirty } = f(doc);
      let _ = value_tx.send(value);
      dirty
    });

    let (ack, done) = oneshot::channel();
    self.tx.send(Request { job, ack }).await.map_err(|_| Error::StoreClosed)?;

    done.await.map_err(|_| Error::StoreClosed)??;
    value_rx.await.map_err(|_| Error::StoreClosed)
  }
}

async fn worker(path: PathBuf, mut rx: mpsc::Receiver<Request>) {
  info!("Store opened at {}", path.display());

  while let Some(Request { job, ack }) = rx.recv().await {
    let result = apply(&path, job).await;
    if let Err(err) = &result {
      warn!("Store request failed: {err}");
    }
    let _ = ack.send(result);
  }

  debug!("Store worker for {} stopped", path.display());
}

async fn apply(path: &Path, job: Job) -> Result<()> {
  let mut doc = load(path).await?;
  if job(&mut doc) {
    save(path, &doc).await?;
  }
  Ok(())
}

/// Reads the whole document. A missing file is an empty document.
pub async fn load(path: &Path) -> Result<Document> {
  match fs::read(path).await {
    Ok(bytes) => decode(&bytes),
    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
      Ok(Document::default())
    }
    Err(err) => Err(err.into()),
  }
}

/// The top level must be an object; anything else is malformed.
fn decode(bytes: &[u8]) -> Result<Document> {
  match json::from_slice::<json::Value>(bytes).map_err(Error::Malformed)? {
    json::Value::Object(map) => {
      json::from_value(json::Value::Object(map)).map_err(Error::Malformed)
    }
    other => {
      let kind = match other {
        json::Value::Array(_) => "an array",
        json::Value::String(_) => "a string",
        json::Value::Number(_) => "a number",
        json::Value::Bool(_) => "a boolean",
        _ => "null",
      };
      Err(Error::Malformed(serde::de::Error::custom(format!(
        "data file must hold an object, found {kind}"
      ))))
    }
  }
}

/// Overwrites the whole document via a sibling temp file and a rename.
pub async fn save(path: &Path, doc: &Document) -> Result<()> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    fs::create_dir_all(parent).await?;
  }

  let bytes = encode(doc)?;

  let temp = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
  if let Err(err) = fs::write(&temp, &bytes).await {
    let _ = fs::remove_file(&temp).await;
    return Err(err.into());
  }
  if let Err(err) = fs::rename(&temp, path).await {
    let _ = fs::remove_file(&temp).await;
    return Err(err.into());
  }

  Ok(())
}

fn encode(doc: &Document) -> Result<Vec<u8>> {
  let mut bytes = Vec::new();
  let formatter = json::ser::PrettyFormatter::with_indent(b"    ");
  let mut ser = json::Serializer::with_formatter(&mut bytes, formatter);
  doc.serialize(&mut ser).map_err(Error::Encode)?;
  Ok(bytes)
}
