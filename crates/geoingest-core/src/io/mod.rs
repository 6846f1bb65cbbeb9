pub mod envi_header;
pub mod envi_reader;
pub mod image_io;
pub mod rpc;

pub use envi_header::{EnviHeader, Interleave, MapInfo};
pub use envi_reader::EnviReader;
pub use rpc::RpcModel;
