// Attachment stores — one binary attachment per media id, whole-replace semantics.

pub mod fs;
pub mod memory;
pub mod traits;
