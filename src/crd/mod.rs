mod volume_replica;

pub use volume_replica::*;
