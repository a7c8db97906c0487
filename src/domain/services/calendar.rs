use crate::domain::models::{booking::Booking, club::Club};
use icalendar::{Calendar, Component, Event as IcalEvent, EventLike};

/// Generates an iCalendar (.ics) string for a confirmed booking
pub fn generate_ics(club: &Club, resource_name: &str, booking: &Booking) -> String {
    let mut calendar = Calendar::new();

    let ical_event = IcalEvent::new()
        .summary(&format!("{} at {}", resource_name, club.name))
        .description(&format!("Booking {}", booking.booking_number))
        .location(&club.name)
        .starts(booking.start_time)
        .ends(booking.end_time)
        .uid(&booking.id)
        .done();

    calendar.push(ical_event);
    calendar.to_string()
}
