//! Message bodies for match notifications

use crate::models::{AddressInput, MatchResult};

const NOT_PROVIDED: &str = "Not provided";

/// Subject line with `{hub_name}` substituted
#[must_use]
pub fn render_subject(template: &str, result: &MatchResult) -> String {
    template.replace("{hub_name}", &result.matched_location.name)
}

/// Plain-text summary of a match, used as the text part of emails
#[must_use]
pub fn format_match_text(result: &MatchResult, input: &AddressInput) -> String {
    let hub = &result.matched_location;
    format!(
        "Nearest Delivery Hub Match Result\n\
         \n\
         Input Address: {}\n\
         Geocoded Address: {}\n\
         \n\
         Nearest Delivery Hub:\n\
         - Name: {}\n\
         - Address: {}\n\
         - Distance: {:.1} miles\n\
         \n\
         Applicant Information:\n\
         - Name: {}\n\
         - Email: {}\n\
         - Phone: {}\n\
         - Application ID: {}\n\
         \n\
         Timestamp: {}\n",
        result.input_address,
        result.geocoded_address,
        hub.name,
        hub.address,
        result.distance_miles,
        input.name.as_deref().unwrap_or(NOT_PROVIDED),
        input.email,
        input.phone.as_deref().unwrap_or(NOT_PROVIDED),
        input.application_id.as_deref().unwrap_or(NOT_PROVIDED),
        result.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

/// HTML email body addressed to the applicant
#[must_use]
pub fn format_match_html(result: &MatchResult, input: &AddressInput) -> String {
    let hub = &result.matched_location;
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<style>
body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px; }}
.header {{ background-color: #f8f8f8; padding: 20px; border-bottom: 2px solid #ddd; }}
.location-details {{ background-color: #f0f7ff; padding: 15px; border-left: 4px solid #0066cc; margin: 20px 0; }}
.footer {{ font-size: 12px; color: #777; border-top: 1px solid #ddd; padding-top: 20px; margin-top: 20px; }}
</style>
</head>
<body>
<div class="header"><h2>Your Nearest Delivery Hub</h2></div>
<div class="content">
<p>Hello {name},</p>
<p>Thank you for your interest in joining our delivery team. We've found the nearest delivery hub to your location:</p>
<div class="location-details">
<h3>{hub_name}</h3>
<p><strong>Address:</strong> {hub_address}</p>
<p><strong>Distance:</strong> {miles:.1} miles from your location</p>
</div>
<p>Your application will be forwarded to this hub's management team, who will contact you with next steps.</p>
<p>Best regards,<br>The Delivery Team</p>
</div>
<div class="footer"><p>This is an automated message. Please do not reply to this email.</p></div>
</body>
</html>
"#,
        name = escape_html(input.display_name()),
        hub_name = escape_html(&hub.name),
        hub_address = escape_html(&hub.address),
        miles = result.distance_miles,
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{GeoPoint, Hub};

    pub(crate) fn sample_result() -> MatchResult {
        let hub = Hub {
            id: "hub-1".to_string(),
            name: "Springfield <Downtown>".to_string(),
            address: "123 Main St".to_string(),
            city: Some("Springfield".to_string()),
            state: Some("IL".to_string()),
            postal_code: None,
            country: None,
            location: GeoPoint::new(39.7817, -89.6501).unwrap(),
            region: None,
            kind: None,
            active: true,
        };
        MatchResult::new(
            "456 Oak Ave".to_string(),
            "456 Oak Ave, Springfield, IL".to_string(),
            GeoPoint::new(39.80, -89.64).unwrap(),
            hub,
            12.0,
        )
    }

    #[test]
    fn test_render_subject() {
        assert_eq!(
            render_subject("Your Nearest Delivery Hub: {hub_name}", &sample_result()),
            "Your Nearest Delivery Hub: Springfield <Downtown>"
        );
    }

    #[test]
    fn test_text_uses_one_decimal_miles_and_placeholders() {
        let input = AddressInput::new("456 Oak Ave", "jane@example.com");
        let text = format_match_text(&sample_result(), &input);
        // 12 km is 7.456452 miles
        assert!(text.contains("- Distance: 7.5 miles"));
        assert!(text.contains("- Phone: Not provided"));
        assert!(text.contains("- Email: jane@example.com"));
        assert!(text.contains(" UTC"));
    }

    #[test]
    fn test_html_greets_by_email_local_part_and_escapes() {
        let input = AddressInput::new("456 Oak Ave", "jane@example.com");
        let html = format_match_html(&sample_result(), &input);
        assert!(html.contains("Hello jane,"));
        assert!(html.contains("Springfield &lt;Downtown&gt;"));
        assert!(html.contains("7.5 miles from your location"));

        let mut named = input.clone();
        named.name = Some("Jane Doe".to_string());
        assert!(format_match_html(&sample_result(), &named).contains("Hello Jane Doe,"));
    }
}
