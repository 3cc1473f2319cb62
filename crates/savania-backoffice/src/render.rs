//! # HTML Fragments
//!
//! Server-rendered pieces of the admin pages: stat cards, contact table
//! rows, pagination bar, and the recent activity list. Every interpolated
//! value goes through [`escape_html`], including values that come from the
//! closed enums.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use savania_core::format::{format_date_fr, format_growth, format_xof, time_ago};
use savania_core::{ContactRecord, ContactStatus, LocalCalendar};

use crate::activity::RecentActivity;
use crate::dashboard::DashboardStats;

/// Shown for figures that are not computed.
pub const NOT_AVAILABLE: &str = "N/D";

/// Escape the five HTML-significant characters.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn rate(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| format!("{v:.1}%"))
}

/// The four dashboard cards.
pub fn stat_cards(stats: &DashboardStats) -> String {
    let growth_class = if stats.revenue_growth >= 0.0 {
        "positive"
    } else {
        "negative"
    };
    format!(
        concat!(
            "<div class=\"stat-card\">",
            "<div class=\"stat-label\">Nouveaux Contacts Aujourd'hui</div>",
            "<div class=\"stat-value\">{new}</div>",
            "<div class=\"stat-change positive\">+{week} cette semaine</div>",
            "</div>\n",
            "<div class=\"stat-card success\">",
            "<div class=\"stat-label\">Réservations Aujourd'hui</div>",
            "<div class=\"stat-value\">{bookings}</div>",
            "<div class=\"stat-change\">Taux occupation: {occupancy}</div>",
            "</div>\n",
            "<div class=\"stat-card warning\">",
            "<div class=\"stat-label\">Revenu Ce Mois</div>",
            "<div class=\"stat-value\">{revenue}</div>",
            "<div class=\"stat-change {growth_class}\">{growth} vs mois dernier</div>",
            "</div>\n",
            "<div class=\"stat-card danger\">",
            "<div class=\"stat-label\">Taux de Conversion</div>",
            "<div class=\"stat-value\">{conversion}</div>",
            "<div class=\"stat-change\">Basé sur 30 jours</div>",
            "</div>\n",
        ),
        new = stats.new_contacts_today,
        week = stats.week_contacts,
        bookings = stats.bookings_today,
        occupancy = escape_html(&rate(stats.occupancy_rate)),
        revenue = escape_html(&format_xof(stats.current_month_revenue)),
        growth_class = growth_class,
        growth = escape_html(&format_growth(stats.revenue_growth)),
        conversion = escape_html(&rate(stats.conversion_rate)),
    )
}

/// `<span class="status-badge status-nouveau">Nouveau</span>`.
pub fn status_badge(status: ContactStatus) -> String {
    format!(
        "<span class=\"status-badge status-{}\">{}</span>",
        escape_html(status.as_str()),
        escape_html(status.label())
    )
}

/// Table rows for the contact list, with view/edit/delete actions keyed by
/// document id.
pub fn contact_rows(records: &[ContactRecord], calendar: &LocalCalendar) -> String {
    let mut out = String::new();
    for record in records {
        let c = &record.contact;
        let id = escape_html(record.id.as_str());
        let _ = write!(
            out,
            concat!(
                "<tr data-id=\"{id}\">",
                "<td>{name}</td><td>{email}</td><td>{phone}</td><td>{service}</td>",
                "<td>{date}</td><td>{badge}</td>",
                "<td>",
                "<button class=\"btn-action view-contact\" data-id=\"{id}\">Voir</button>",
                "<button class=\"btn-action edit-contact\" data-id=\"{id}\">Modifier</button>",
                "<button class=\"btn-action delete-contact\" data-id=\"{id}\">Supprimer</button>",
                "</td></tr>\n",
            ),
            id = id,
            name = escape_html(&c.name),
            email = escape_html(&c.email),
            phone = escape_html(c.phone.as_deref().unwrap_or("N/A")),
            service = escape_html(c.service.label()),
            date = escape_html(&format_date_fr(calendar.local_date(c.submitted_at))),
            badge = status_badge(c.status),
        );
    }
    out
}

/// One button per page; the current one is marked `active`.
pub fn pagination(current: usize, total_pages: usize) -> String {
    let mut out = String::new();
    for page in 1..=total_pages {
        let class = if page == current { "active" } else { "" };
        let _ = write!(
            out,
            "<button class=\"{class}\" data-page=\"{page}\">{page}</button>"
        );
    }
    out
}

/// Recent contacts then recent reservations, with relative times.
pub fn activity_list(
    activity: &RecentActivity,
    now: DateTime<Utc>,
    calendar: &LocalCalendar,
) -> String {
    let mut out = String::new();
    for record in &activity.contacts {
        let c = &record.contact;
        let _ = write!(
            out,
            concat!(
                "<div class=\"activity-item\">",
                "<div class=\"activity-icon contact\">👤</div>",
                "<div class=\"activity-content\"><strong>{name}</strong> a contacté pour {service}",
                "<div class=\"activity-time\">{ago}</div></div></div>\n",
            ),
            name = escape_html(&c.name),
            service = escape_html(c.service.label()),
            ago = escape_html(&time_ago(c.submitted_at, now, calendar)),
        );
    }
    for record in &activity.reservations {
        let r = &record.reservation;
        let _ = write!(
            out,
            concat!(
                "<div class=\"activity-item\">",
                "<div class=\"activity-icon reservation\">📅</div>",
                "<div class=\"activity-content\">Réservation {kind} pour {client}",
                "<div class=\"activity-time\">{ago} - {total}</div></div></div>\n",
            ),
            kind = escape_html(&r.kind),
            client = escape_html(&r.client_name),
            ago = escape_html(&time_ago(r.created_at, now, calendar)),
            total = escape_html(&format_xof(r.total_incl_tax)),
        );
    }
    if out.is_empty() {
        out.push_str("<p>Aucune activité récente</p>");
    }
    out
}
