pub mod anomaly_repo;
pub mod incident_repo;
pub mod reading_repo;

pub use anomaly_repo::AnomalyRepo;
pub use incident_repo::IncidentRepo;
pub use reading_repo::ReadingRepo;
