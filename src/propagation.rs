use crate::constants::{
    Celsius, MetersPerSecond, DEFAULT_SPEED_OF_SOUND, SPEED_OF_SOUND_AT_ZERO_C,
    SPEED_OF_SOUND_SLOPE,
};

/// Speed of sound in air.
///
/// Arguments
/// ---------
/// * `temperature_c`: ambient temperature in °C, if a station reported one.
///
/// Returns
/// -------
/// * `343.0` m/s when no temperature is given, otherwise the linear law
///   `331.3 + 0.606 · T`.
pub fn speed_of_sound(temperature_c: Option<Celsius>) -> MetersPerSecond {
    match temperature_c {
        None => DEFAULT_SPEED_OF_SOUND,
        Some(t) => SPEED_OF_SOUND_AT_ZERO_C + SPEED_OF_SOUND_SLOPE * t,
    }
}
