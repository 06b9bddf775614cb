use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::delivery::Delivery;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleHold {
    pub minutes_until_assignment: i64,
    pub scheduled_pickup_time: DateTime<Utc>,
    pub assignment_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Proceed,
    TooEarly(ScheduleHold),
}

/// Holds scheduled deliveries back until `lead_minutes` before pickup.
pub fn check_schedule(delivery: &Delivery, now: DateTime<Utc>, lead_minutes: i64) -> GateDecision {
    let Some(scheduled_pickup_time) = delivery
        .scheduled_pickup_time
        .filter(|_| delivery.is_scheduled)
    else {
        return GateDecision::Proceed;
    };

    let assignment_time = scheduled_pickup_time - Duration::minutes(lead_minutes);
    if now >= assignment_time {
        return GateDecision::Proceed;
    }

    GateDecision::TooEarly(ScheduleHold {
        minutes_until_assignment: ceil_minutes(assignment_time - now),
        scheduled_pickup_time,
        assignment_time,
    })
}

/// Whole minutes, rounded up. Any positive remainder counts as a minute.
fn ceil_minutes(remaining: Duration) -> i64 {
    let whole = remaining.num_minutes();
    if remaining > Duration::minutes(whole) {
        whole + 1
    } else {
        whole
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::{check_schedule, GateDecision};
    use crate::models::geo::GeoPoint;
    use crate::test_support::{base_time, delivery_at};

    fn scheduled_in(minutes: i64, seconds: i64) -> crate::models::delivery::Delivery {
        let mut delivery = delivery_at(GeoPoint::new(14.55, 121.0), GeoPoint::new(14.6, 121.0));
        delivery.is_scheduled = true;
        delivery.scheduled_pickup_time =
            Some(base_time() + Duration::minutes(minutes) + Duration::seconds(seconds));
        delivery
    }

    #[test]
    fn unscheduled_delivery_proceeds() {
        let delivery = delivery_at(GeoPoint::new(14.55, 121.0), GeoPoint::new(14.6, 121.0));
        assert_eq!(check_schedule(&delivery, base_time(), 15), GateDecision::Proceed);
    }

    #[test]
    fn twenty_minutes_out_waits_five_minutes() {
        let delivery = scheduled_in(20, 0);
        match check_schedule(&delivery, base_time(), 15) {
            GateDecision::TooEarly(hold) => {
                assert_eq!(hold.minutes_until_assignment, 5);
                assert_eq!(hold.assignment_time, base_time() + Duration::minutes(5));
                assert_eq!(hold.scheduled_pickup_time, base_time() + Duration::minutes(20));
            }
            GateDecision::Proceed => panic!("expected the gate to hold"),
        }
    }

    #[test]
    fn partial_minutes_round_up() {
        let delivery = scheduled_in(15, 1);
        match check_schedule(&delivery, base_time(), 15) {
            GateDecision::TooEarly(hold) => assert_eq!(hold.minutes_until_assignment, 1),
            GateDecision::Proceed => panic!("expected the gate to hold"),
        }
    }

    #[test]
    fn sub_millisecond_remainder_still_reports_a_minute() {
        let mut delivery = scheduled_in(15, 0);
        delivery.scheduled_pickup_time = delivery
            .scheduled_pickup_time
            .map(|at| at + Duration::microseconds(500));
        match check_schedule(&delivery, base_time(), 15) {
            GateDecision::TooEarly(hold) => assert_eq!(hold.minutes_until_assignment, 1),
            GateDecision::Proceed => panic!("expected the gate to hold"),
        }
    }

    #[test]
    fn inside_lead_time_proceeds() {
        let delivery = scheduled_in(10, 0);
        assert_eq!(check_schedule(&delivery, base_time(), 15), GateDecision::Proceed);
    }

    #[test]
    fn exactly_at_assignment_time_proceeds() {
        let delivery = scheduled_in(15, 0);
        assert_eq!(check_schedule(&delivery, base_time(), 15), GateDecision::Proceed);
    }

    #[test]
    fn past_pickup_time_proceeds() {
        let delivery = scheduled_in(-30, 0);
        assert_eq!(check_schedule(&delivery, base_time(), 15), GateDecision::Proceed);
    }
}
