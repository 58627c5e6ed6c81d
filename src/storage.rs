use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult, TransactionalTree};
use sled::{Db, Tree};
use std::marker::PhantomData;
use std::path::Path;

use crate::error::{ApiError, StoreError};
use crate::models::{Admin, Document, Sclass, Student, Subject, Teacher};

/// Typed view over one sled tree of JSON documents keyed by `_id`.
pub struct Collection<T> {
    tree: Tree,
    _doc: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
            _doc: PhantomData,
        }
    }
}

impl<T: Document> Collection<T> {
    fn open(db: &Db) -> Result<Self, StoreError> {
        Ok(Self {
            tree: db.open_tree(T::TREE)?,
            _doc: PhantomData,
        })
    }

    /// Raw tree, for multi-collection transactions.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        match self.tree.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Full scan filtered by `pred`, in key order.
    pub fn find<F>(&self, pred: F) -> Result<Vec<T>, StoreError>
    where
        F: Fn(&T) -> bool,
    {
        let mut docs = vec![];
        for item in self.tree.iter() {
            let (_, value) = item?;
            let doc: T = serde_json::from_slice(&value)?;
            if pred(&doc) {
                docs.push(doc);
            }
        }
        Ok(docs)
    }

    pub fn find_one<F>(&self, pred: F) -> Result<Option<T>, StoreError>
    where
        F: Fn(&T) -> bool,
    {
        for item in self.tree.iter() {
            let (_, value) = item?;
            let doc: T = serde_json::from_slice(&value)?;
            if pred(&doc) {
                return Ok(Some(doc));
            }
        }
        Ok(None)
    }

    /// Insert or replace by id.
    pub fn put(&self, doc: &T) -> Result<(), StoreError> {
        let json_bytes = serde_json::to_vec(doc)?;
        self.tree.insert(doc.id().as_bytes(), json_bytes)?;
        Ok(())
    }

    pub fn remove(&self, id: &str) -> Result<Option<T>, StoreError> {
        match self.tree.remove(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

/// sled-backed document store: one tree per document type.
#[derive(Clone)]
pub struct Storage {
    db: Db,
    pub admins: Collection<Admin>,
    pub teachers: Collection<Teacher>,
    pub students: Collection<Student>,
    pub subjects: Collection<Subject>,
    pub sclasses: Collection<Sclass>,
}

impl Storage {
    /// Open or create the sled database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::from_db(sled::open(path)?)
    }

    /// In-memory database removed on drop.
    pub fn temporary() -> Result<Self, StoreError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: Db) -> Result<Self, StoreError> {
        Ok(Self {
            admins: Collection::open(&db)?,
            teachers: Collection::open(&db)?,
            students: Collection::open(&db)?,
            subjects: Collection::open(&db)?,
            sclasses: Collection::open(&db)?,
            db,
        })
    }

    pub async fn flush(&self) -> Result<(), StoreError> {
        self.db.flush_async().await?;
        Ok(())
    }
}

// --- Transaction helpers: typed access to a TransactionalTree ---

pub type TxResult<T> = ConflictableTransactionResult<T, ApiError>;

pub fn abort<T>(err: ApiError) -> TxResult<T> {
    Err(ConflictableTransactionError::Abort(err))
}

fn codec(e: serde_json::Error) -> ConflictableTransactionError<ApiError> {
    ConflictableTransactionError::Abort(ApiError::from(e))
}

pub fn tx_get<T: Document>(tree: &TransactionalTree, id: &str) -> TxResult<Option<T>> {
    match tree.get(id.as_bytes())? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes).map_err(codec)?)),
        None => Ok(None),
    }
}

pub fn tx_put<T: Document>(tree: &TransactionalTree, doc: &T) -> TxResult<()> {
    let json_bytes = serde_json::to_vec(doc).map_err(codec)?;
    tree.insert(doc.id().as_bytes(), json_bytes)?;
    Ok(())
}

pub fn tx_remove<T: Document>(tree: &TransactionalTree, id: &str) -> TxResult<Option<T>> {
    match tree.remove(id.as_bytes())? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes).map_err(codec)?)),
        None => Ok(None),
    }
}

/// Re-read `id` inside the transaction and apply `f`; writes back only if
/// `f` reports a change. Missing documents are skipped.
pub fn tx_modify<T, F>(tree: &TransactionalTree, id: &str, f: F) -> TxResult<bool>
where
    T: Document,
    F: FnOnce(&mut T) -> bool,
{
    let Some(mut doc) = tx_get::<T>(tree, id)? else {
        return Ok(false);
    };
    if f(&mut doc) {
        tx_put(tree, &doc)?;
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{new_id, Role};
    use sled::Transactional;

    fn sclass(school: &str, name: &str) -> Sclass {
        Sclass {
            id: new_id(),
            sclass_name: name.to_string(),
            school: school.to_string(),
        }
    }

    #[test]
    fn test_put_get_find_remove() {
        let storage = Storage::temporary().expect("temporary store");
        let a = sclass("s1", "7A");
        let b = sclass("s1", "7B");
        let c = sclass("s2", "8A");
        for doc in [&a, &b, &c] {
            storage.sclasses.put(doc).unwrap();
        }

        assert_eq!(storage.sclasses.get(&a.id).unwrap().unwrap().sclass_name, "7A");
        assert_eq!(storage.sclasses.find(|s| s.school == "s1").unwrap().len(), 2);
        assert!(storage
            .sclasses
            .find_one(|s| s.sclass_name == "8A")
            .unwrap()
            .is_some());

        assert!(storage.sclasses.remove(&a.id).unwrap().is_some());
        assert!(storage.sclasses.remove(&a.id).unwrap().is_none());
        assert!(storage.sclasses.get(&a.id).unwrap().is_none());
    }

    #[test]
    fn test_aborted_transaction_leaves_all_trees_untouched() {
        let storage = Storage::temporary().unwrap();
        let admin = Admin {
            id: new_id(),
            name: "Head".into(),
            email: "head@x.com".into(),
            password: "hash".into(),
            role: Role::Admin,
            school_name: "Hill".into(),
        };
        storage.admins.put(&admin).unwrap();
        let class = sclass(&admin.id, "7A");

        let result: Result<(), ApiError> = (storage.sclasses.tree(), storage.admins.tree())
            .transaction(|(sclasses, admins)| {
                tx_put(sclasses, &class)?;
                tx_remove::<Admin>(admins, &admin.id)?;
                abort(ApiError::not_found("nope"))
            })
            .map_err(ApiError::from);

        assert!(matches!(result, Err(ApiError::NotFound(_))));
        assert!(storage.sclasses.get(&class.id).unwrap().is_none());
        assert!(storage.admins.get(&admin.id).unwrap().is_some());
    }
}
