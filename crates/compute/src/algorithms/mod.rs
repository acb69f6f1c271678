pub mod autoencoder;
pub mod dbscan;
pub mod isolation_forest;
