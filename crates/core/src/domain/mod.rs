pub mod customer;
pub mod invoice;
pub mod recommendation;
