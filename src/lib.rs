pub mod error;
pub mod flags;
pub mod header;
pub mod directory;
pub mod codec;
pub mod integrity;
pub mod accessor;
pub mod superblock;
pub mod io_stream;
pub mod container;
pub mod varint;
pub mod form;

pub use error::{ContainerError, ErrorKind};
pub use flags::{ItemFlags, TypeAndFlags, pack, type_of, has_flag};
pub use header::{ItemHeader, WireVersion};
pub use directory::ContainerDirectory;
pub use accessor::{SubstreamAccessor, Substream, BoundedReader};
pub use integrity::IntegrityAlgorithm;
pub use io_stream::{ContainerWriter, ContainerReader};
pub use container::{Container, PackOptions};
