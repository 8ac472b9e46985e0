pub mod directions;
pub mod telegram;
pub mod weather;

pub use directions::{DirectionsClient, RouteLeg};
pub use telegram::{BotClient, IncomingMessage};
pub use weather::WeatherClient;
