use crate::{
  prelude::*,
  store::{Store, Tx},
};

/// The shared link handed out to verified members.
pub struct Link<'a> {
  store: &'a Store,
}

impl<'a> Link<'a> {
  pub fn new(store: &'a Store) -> Self {
    Self { store }
  }

  pub async fn get(&self) -> Result<Option<String>> {
    self
      .store
      .read(|doc| Some(doc.link.clone()).filter(|link| !link.is_empty()))
      .await
  }

  pub async fn set(&self, link: String) -> Result<()> {
    let link = link.trim().to_string();
    self
      .store
      .transact(move |doc| {
        if doc.link == link {
          return Tx::keep(());
        }
        doc.link = link;
        Tx::save(())
      })
      .await
  }
}
