mod account;
mod care_event;
mod plant;
mod session;

pub use account::{Account, PublicAccount};
pub use care_event::{CareEvent, NewCareEvent};
pub use plant::{Category, NewPlant, Plant, PlantUpdate, MAX_CARE_FREQUENCY_DAYS};
pub use session::Session;

use chrono::{DateTime, Duration, SubsecRound, Utc};

/// Current time at the precision timestamps are persisted with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// A fresh timestamp strictly after `previous`, even if the clock has not moved.
pub fn bump(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}
