/*!
# Fireground DevKit - Fixtures et simulateur pour développement

Bibliothèque facilitant le développement autour du kernel Fireground:
- Builders de payloads JSON pour les topics du flux (telemetry, beacons_data, new_alert)
- Scénario synthétique déterministe pour le simulateur `fireground-sim`
*/

pub mod payloads;
pub mod scenario;

pub use payloads::{FiregroundMessageBuilder, TelemetryBuilder};
pub use scenario::{Frame, Scenario};
