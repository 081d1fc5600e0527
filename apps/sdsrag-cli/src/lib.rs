pub mod corpus;
pub mod setup;
