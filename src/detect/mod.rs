// Payload sniffing for downloads whose origin does not declare a useful content type.

pub mod container;
