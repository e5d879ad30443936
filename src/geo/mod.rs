use crate::models::courier::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6_371.0;

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let (lat_a, lat_b) = (a.lat.to_radians(), b.lat.to_radians());
    let half_dlat = (b.lat - a.lat).to_radians() / 2.0;
    let half_dlng = (b.lng - a.lng).to_radians() / 2.0;

    let h = half_dlat.sin().powi(2) + lat_a.cos() * lat_b.cos() * half_dlng.sin().powi(2);
    let central_angle = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * central_angle
}

#[cfg(test)]
mod tests {
    use super::haversine_km;
    use crate::models::courier::GeoPoint;

    #[test]
    fn zero_distance_for_same_point() {
        let p = GeoPoint {
            lat: 1.3521,
            lng: 103.8198,
        };
        assert!(haversine_km(&p, &p) < 1e-9);
    }

    #[test]
    fn cross_town_hop_is_a_few_km() {
        let merchant = GeoPoint {
            lat: 1.3048,
            lng: 103.8318,
        };
        let customer = GeoPoint {
            lat: 1.3329,
            lng: 103.8470,
        };
        let distance = haversine_km(&merchant, &customer);
        assert!(distance > 2.0 && distance < 5.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = GeoPoint {
            lat: 1.29,
            lng: 103.85,
        };
        let b = GeoPoint {
            lat: 1.44,
            lng: 103.79,
        };
        assert!((haversine_km(&a, &b) - haversine_km(&b, &a)).abs() < 1e-9);
    }
}
