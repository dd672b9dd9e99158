pub mod identity;
pub mod memory;

pub use identity::PostgresIdentityRepository;
pub use memory::InMemoryIdentityRepository;
