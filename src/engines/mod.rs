pub mod consultation;
pub mod environment;
pub mod score;
pub mod symptoms;
pub mod trend;
pub mod weather;

pub use environment::assess_environment;
pub use symptoms::assess_symptoms;
pub use trend::assess_location_trend;
pub use weather::assess_weather;
