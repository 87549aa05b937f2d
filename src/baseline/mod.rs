pub mod cops;
pub mod robber;
