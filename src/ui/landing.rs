//! Marketing landing page.

use super::icons::Icon;
use super::shell::document;

const PAGE_TITLE: &str = "PropertyLoop";

const HERO_IMAGE: &str = "https://images.unsplash.com/photo-1600585154340-be6161a56a0c?auto=format&fit=crop&w=1950&q=80";

const NAV_LINKS: [&str; 6] = [
    "Pricing",
    "Lettings Service",
    "Property Search",
    "Property Management",
    "Landlord Portal",
    "Join As An Agent",
];

const ACTION_CARDS: [(Icon, &str); 6] = [
    (Icon::Home, "Looking for a tenant"),
    (Icon::Settings, "Manage my tenancy"),
    (Icon::Building, "Want to sell"),
    (Icon::Search, "Book a valuation"),
    (Icon::Calendar, "Looking to buy"),
    (Icon::Building2, "Find a property to rent"),
];

/// Full landing page with the widget fragment embedded.
#[must_use]
pub fn page(widget_html: &str) -> String {
    let body = format!(
        "{nav}\n{hero}\n{cards}\n{launcher}\n{rent}\n{widget_html}",
        nav = navigation(),
        hero = hero(),
        cards = action_cards(),
        launcher = launcher(),
        rent = rent_section(),
    );
    document(PAGE_TITLE, &body)
}

fn navigation() -> String {
    let links: String = NAV_LINKS
        .iter()
        .map(|label| format!(r##"<a href="#" class="text-gray-600 hover:text-gray-900">{label}</a>"##))
        .collect();

    format!(
        r#"<nav class="fixed top-0 w-full bg-white shadow-sm z-50">
    <div class="max-w-7xl mx-auto px-4 sm:px-6 lg:px-8">
        <div class="flex justify-between items-center h-16">
            <div class="flex items-center"><span class="text-xl font-bold">PropertyLoop</span></div>
            <div class="hidden md:flex items-center space-x-8">{links}</div>
            <div class="flex items-center space-x-4">{menu}{user}</div>
        </div>
    </div>
</nav>"#,
        menu = Icon::Menu.svg("h-6 w-6 md:hidden"),
        user = Icon::User.svg("h-6 w-6"),
    )
}

fn hero() -> String {
    format!(
        r#"<div class="relative pt-32 pb-32 flex content-center items-center justify-center" style="min-height: 100vh; background-image: url('{HERO_IMAGE}'); background-size: cover; background-position: center;">
    <div class="absolute top-0 w-full h-full bg-black opacity-50"></div>
    <div class="container relative mx-auto">
        <div class="w-full px-4 ml-auto mr-auto text-center">
            <h1 class="text-white font-semibold text-5xl mb-8">Home of The Best Local Estate Agents</h1>
            <h2 class="text-white text-3xl mb-12">What would you like to do?</h2>
        </div>
    </div>
</div>"#
    )
}

fn action_cards() -> String {
    let cards: String = ACTION_CARDS
        .iter()
        .map(|(icon, label)| {
            format!(
                r#"<div class="w-full md:w-1/2 lg:w-1/3 px-4 mb-8">
            <div class="bg-white rounded-lg p-8 shadow-lg text-center hover:shadow-xl transition-shadow duration-300">
                {icon}
                <h3 class="text-xl font-semibold mb-2">{label}</h3>
            </div>
        </div>"#,
                icon = icon.svg("h-12 w-12 mx-auto mb-4"),
            )
        })
        .collect();

    format!(
        r#"<div class="container mx-auto px-4 -mt-32 relative z-10">
    <div class="flex flex-wrap">{cards}</div>
</div>"#
    )
}

/// Floating button that opens the widget.
fn launcher() -> String {
    format!(
        r##"<form method="post" action="/widget/open" hx-post="/widget/open" hx-target="#chat-widget" hx-swap="outerHTML">
    <button type="submit" class="fixed bottom-8 right-8 bg-blue-600 hover:bg-blue-700 text-white p-4 rounded-full shadow-lg transition-all duration-300 z-50" aria-label="Open chat">{}</button>
</form>"##,
        Icon::Infinity.svg("h-6 w-6")
    )
}

fn rent_section() -> &'static str {
    r#"<div class="bg-gray-100 py-20 mt-20">
    <div class="container mx-auto px-4">
        <h2 class="text-4xl font-semibold text-center mb-12">How much rent can you achieve?</h2>
    </div>
</div>"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_contains_landing_sections() {
        let html = page(r#"<div id="chat-widget"></div>"#);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Home of The Best Local Estate Agents"));
        assert!(html.contains("What would you like to do?"));
        assert!(html.contains("How much rent can you achieve?"));
        for label in NAV_LINKS {
            assert!(html.contains(label), "missing nav link {label}");
        }
        for (_, label) in ACTION_CARDS {
            assert!(html.contains(label), "missing card {label}");
        }
        assert!(html.contains(r#"action="/widget/open""#));
        assert!(html.contains(r#"<div id="chat-widget"></div>"#));
    }
}
