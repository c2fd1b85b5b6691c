//! Airport resolution for origin/destination identifiers.

use flight_config::AirportConfig;
use flight_core::geo::{GeoPoint, haversine_m};
use flight_core::units::ft_to_m;

use crate::PlannerError;

#[derive(Debug, Clone, PartialEq)]
pub struct Airport {
    pub code: String,
    pub name: String,
    pub position: GeoPoint,
    pub elevation_m: f64,
}

impl Airport {
    pub fn new(code: impl Into<String>, position: GeoPoint, elevation_m: f64) -> Self {
        let code = code.into();
        Self {
            name: code.clone(),
            code,
            position,
            elevation_m,
        }
    }
}

/// Navigation-data collaborator resolving identifiers to airports.
pub trait Navigation {
    fn resolve(&self, code: &str) -> Option<Airport>;
}

/// In-memory airport table keyed by ICAO code.
#[derive(Debug, Clone, Default)]
pub struct AirportCatalog {
    airports: Vec<Airport>,
}

impl AirportCatalog {
    pub fn from_configs(configs: &[AirportConfig]) -> Self {
        let airports = configs
            .iter()
            .map(|cfg| Airport {
                code: cfg.icao.to_uppercase(),
                name: cfg.name.clone(),
                position: GeoPoint::new(cfg.longitude, cfg.latitude),
                elevation_m: ft_to_m(cfg.elevation_ft),
            })
            .collect();
        Self { airports }
    }

    pub fn airports(&self) -> &[Airport] {
        &self.airports
    }
}

impl Navigation for AirportCatalog {
    fn resolve(&self, code: &str) -> Option<Airport> {
        let upper = code.to_uppercase();
        self.airports.iter().find(|a| a.code == upper).cloned()
    }
}

/// Origin/destination pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub origin: Airport,
    pub destination: Airport,
}

impl Route {
    pub fn new(origin: Airport, destination: Airport) -> Self {
        Self {
            origin,
            destination,
        }
    }

    pub fn resolve<N: Navigation + ?Sized>(
        navigation: &N,
        origin: &str,
        destination: &str,
    ) -> Result<Self, PlannerError> {
        let lookup = |code: &str| {
            navigation
                .resolve(code)
                .ok_or_else(|| PlannerError::UnknownAirport(code.to_string()))
        };
        Ok(Self::new(lookup(origin)?, lookup(destination)?))
    }

    /// Great-circle distance between the airports (m).
    pub fn distance_m(&self) -> f64 {
        haversine_m(self.origin.position, self.destination.position)
    }
}
