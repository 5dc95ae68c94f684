mod http;
mod maps;
mod police;
mod routing;
mod server;
mod weather;

pub use http::build_client;
pub use maps::directions_url;
pub use police::{Neighbourhood, PoliceClient};
pub use routing::{RoutingClient, analyze_route};
pub use server::{ApiClient, SERVER_HTTP_URL};
pub use weather::WeatherClient;
