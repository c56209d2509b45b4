// Media descriptors and remote URL resolution for the supported storage providers.

pub mod descriptor;
pub mod resolver;
