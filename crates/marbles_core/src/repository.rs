//! Marble records, their private details and the color index.
//!
//! [`MarbleRepository`] owns the cross-collection invariants:
//!
//! - every marble has exactly one color index entry, and every index entry
//!   points at an existing marble
//! - private details exist for a name exactly when the marble does
//! - marble names are unique in the general collection
//!
//! Writes are issued in a fixed order but are only atomic as a group when
//! the surrounding store transaction commits atomically. A failure halfway
//! returns the error without compensating writes; the host transaction is
//! expected to abort.

use crate::config::Config;
use crate::error::{CoreError, CoreResult, RecordKind};
use crate::index::ColorNameIndex;
use crate::input::{marble_name, CreateMarble, DeleteMarble, Mutation, TransferMarble};
use crate::model::{Marble, MarblePrivateDetails};
use bytes::Bytes;
use marbles_storage::KeyValueStore;
use tracing::{debug, info};

/// CRUD over marbles and their private details.
pub struct MarbleRepository<'a, S: KeyValueStore + ?Sized> {
    store: &'a mut S,
    config: &'a Config,
}

impl<'a, S: KeyValueStore + ?Sized> MarbleRepository<'a, S> {
    /// Creates a repository over `store`.
    pub fn new(store: &'a mut S, config: &'a Config) -> Self {
        Self { store, config }
    }

    fn index(&self) -> ColorNameIndex<'a> {
        let config: &'a Config = self.config;
        ColorNameIndex::new(&config.marbles_collection, &config.color_index)
    }

    /// Applies a validated mutation.
    ///
    /// # Errors
    ///
    /// See [`create`](Self::create), [`transfer`](Self::transfer) and
    /// [`delete`](Self::delete).
    pub fn apply(&mut self, mutation: &Mutation) -> CoreResult<()> {
        match mutation {
            Mutation::Create(input) => self.create(input),
            Mutation::Transfer(input) => self.transfer(input),
            Mutation::Delete(input) => self.delete(input),
        }
    }

    /// Returns true if a marble named `name` exists.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Store`] if the read fails.
    pub fn exists(&self, name: &str) -> CoreResult<bool> {
        Ok(self
            .store
            .get(&self.config.marbles_collection, name)?
            .is_some())
    }

    /// Creates a marble, its private details and its index entry.
    ///
    /// The uniqueness check is a plain read before the writes. Two
    /// concurrent creates of the same name can both pass it; only the host's
    /// write conflict detection picks a single winner.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidField`] if the name is empty or in the index
    ///   key namespace
    /// - [`CoreError::AlreadyExists`] if the name is taken
    /// - [`CoreError::Store`] if a read or write fails
    pub fn create(&mut self, input: &CreateMarble) -> CoreResult<()> {
        marble_name(&input.name)?;
        if self.exists(&input.name)? {
            debug!(name = %input.name, "marble already exists");
            return Err(CoreError::AlreadyExists {
                name: input.name.clone(),
            });
        }

        let marble = Marble {
            object_type: self.config.marble_doc_type.clone(),
            name: input.name.clone(),
            color: input.color.clone(),
            size: input.size,
            owner: input.owner.clone(),
        };
        let details = MarblePrivateDetails {
            object_type: self.config.private_details_doc_type.clone(),
            name: input.name.clone(),
            price: input.price,
        };

        // Nothing is written unless all three entries encode.
        let marble_bytes = marble.to_bytes()?;
        let details_bytes = details.to_bytes()?;
        let index = self.index();
        index.key(&marble.color, &marble.name)?;

        self.store
            .put(&self.config.marbles_collection, &marble.name, marble_bytes)?;
        self.store.put(
            &self.config.private_details_collection,
            &details.name,
            details_bytes,
        )?;
        index.add(&mut *self.store, &marble)?;

        info!(name = %marble.name, color = %marble.color, "marble created");
        Ok(())
    }

    /// Returns the stored marble bytes unmodified.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] if no marble has this name
    /// - [`CoreError::Store`] if the read fails
    pub fn read_marble(&self, name: &str) -> CoreResult<Bytes> {
        self.store
            .get(&self.config.marbles_collection, name)?
            .ok_or_else(|| CoreError::not_found(RecordKind::Marble, name))
    }

    /// Returns the stored private details bytes unmodified.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] if no details exist for this name
    /// - [`CoreError::Store`] if the read fails
    pub fn read_private_details(&self, name: &str) -> CoreResult<Bytes> {
        self.store
            .get(&self.config.private_details_collection, name)?
            .ok_or_else(|| CoreError::not_found(RecordKind::PrivateDetails, name))
    }

    /// Reads and decodes a marble.
    ///
    /// # Errors
    ///
    /// As [`read_marble`](Self::read_marble), plus [`CoreError::Decode`] if
    /// the stored bytes are not a marble.
    pub fn get_marble(&self, name: &str) -> CoreResult<Marble> {
        Marble::from_bytes(&self.read_marble(name)?)
    }

    /// Reads and decodes private details.
    ///
    /// # Errors
    ///
    /// As [`read_private_details`](Self::read_private_details), plus
    /// [`CoreError::Decode`] if the stored bytes are not details.
    pub fn get_private_details(&self, name: &str) -> CoreResult<MarblePrivateDetails> {
        MarblePrivateDetails::from_bytes(&self.read_private_details(name)?)
    }

    /// Sets a new owner on an existing marble.
    ///
    /// The owner is not part of the index key, so neither the index nor the
    /// private details are touched.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidField`] if the name is in the index key namespace
    /// - [`CoreError::NotFound`] if no marble has this name
    /// - [`CoreError::Decode`] if the stored marble is corrupt
    /// - [`CoreError::Store`] if a read or write fails
    pub fn transfer(&mut self, input: &TransferMarble) -> CoreResult<()> {
        marble_name(&input.name)?;
        let mut marble = self.get_marble(&input.name)?;
        let previous = std::mem::replace(&mut marble.owner, input.owner.clone());

        self.store.put(
            &self.config.marbles_collection,
            &input.name,
            marble.to_bytes()?,
        )?;

        info!(name = %marble.name, from = %previous, to = %marble.owner, "marble transferred");
        Ok(())
    }

    /// Deletes a marble, its index entry and its private details.
    ///
    /// The stored marble is decoded first to recover the color needed for
    /// the index key.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidField`] if the name is in the index key namespace
    /// - [`CoreError::NotFound`] if no marble has this name
    /// - [`CoreError::Decode`] if the stored marble is corrupt
    /// - [`CoreError::Store`] if a read or delete fails
    pub fn delete(&mut self, input: &DeleteMarble) -> CoreResult<()> {
        marble_name(&input.name)?;
        let marble = self.get_marble(&input.name)?;
        let index = self.index();

        self.store
            .delete(&self.config.marbles_collection, &input.name)?;
        index.remove(&mut *self.store, &marble)?;
        self.store
            .delete(&self.config.private_details_collection, &input.name)?;

        info!(name = %input.name, color = %marble.color, "marble deleted");
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> std::fmt::Debug for MarbleRepository<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarbleRepository")
            .field("marbles_collection", &self.config.marbles_collection)
            .field("private_details_collection", &self.config.private_details_collection)
            .finish_non_exhaustive()
    }
}
