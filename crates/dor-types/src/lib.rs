//! Foundation types for the digital object repository (DOR).
//!
//! This crate provides the value types shared by the storage backends, the
//! lifecycle engine, and every transport adapter. Every other DOR crate
//! depends on `dor-types`.
//!
//! # Key Types
//!
//! - [`Identifier`]: Location-bearing reference to a stored object
//! - [`ContentType`]: Closed registry of content-type tags
//! - [`DigitalObject`]: Immutable payload plus its content type
//! - [`RepositoryAction`]: What happened to an object (add, modify, delete, request)
//! - [`DublinCore`]: Dublin Core metadata record serialized as a
//!   `DUBLIN_CORE_METADATA` object

pub mod action;
pub mod content_type;
pub mod dublin_core;
pub mod error;
pub mod identifier;
pub mod object;

pub use action::RepositoryAction;
pub use content_type::ContentType;
pub use dublin_core::{DublinCore, DublinCoreElement, DublinCoreNamespace};
pub use error::TypeError;
pub use identifier::Identifier;
pub use object::DigitalObject;
