//! Cálculo de distancia great-circle
//!
//! Fórmula de haversine sobre una esfera de radio terrestre. La distancia
//! de un trip se calcula solo entre sus puntos de inicio y fin; el trail
//! de waypoints no participa en el cálculo.

/// Radio de la Tierra en kilómetros
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Distancia great-circle entre dos puntos (lat, lng) en grados,
/// redondeada a 2 decimales.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlng = (lng2 - lng1).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    round_2dp(EARTH_RADIUS_KM * c)
}

/// Redondear a 2 decimales
pub fn round_2dp(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
