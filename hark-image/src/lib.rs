//! Base images for hark machines.
//!
//! An [`Image`] is identified by driver, guest and version, and is encoded
//! into a deterministic file name (for the local [`ImageCache`]) or object
//! key (for a [`BucketImageSource`]). Both encodings parse back into the
//! same image.

pub mod cache;
pub mod image;
pub mod object_store;
pub mod remote;

pub use cache::ImageCache;
pub use image::{find_image, Image};
pub use object_store::{BucketImageSource, ObjectStore, KEY_PREFIX};
pub use remote::RemoteImageStore;
