//! Icon library for icon fields.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct IconDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub category: &'static str,
    pub keywords: &'static [&'static str],
}

pub const CATEGORIES: [&str; 7] = [
    "contact",
    "social",
    "business",
    "technology",
    "creative",
    "service",
    "transportation",
];

macro_rules! icon {
    ($id:literal, $name:literal, $category:literal, [$($kw:literal),* $(,)?]) => {
        IconDefinition { id: $id, name: $name, category: $category, keywords: &[$($kw),*] }
    };
}

pub const ICONS: &[IconDefinition] = &[
    icon!("phone", "Phone", "contact", ["phone", "call", "contact", "telephone"]),
    icon!("email", "Email", "contact", ["email", "mail", "contact", "message"]),
    icon!("location", "Location", "contact", ["location", "address", "map", "place"]),
    icon!("website", "Website", "contact", ["website", "web", "internet", "url", "link"]),
    icon!("linkedin", "LinkedIn", "social", ["linkedin", "social", "professional", "network"]),
    icon!("twitter", "Twitter", "social", ["twitter", "social", "tweet", "x"]),
    icon!("instagram", "Instagram", "social", ["instagram", "social", "photo", "camera"]),
    icon!("facebook", "Facebook", "social", ["facebook", "social", "network"]),
    icon!("youtube", "YouTube", "social", ["youtube", "video", "social", "channel"]),
    icon!("building", "Building", "business", ["building", "office", "company", "business"]),
    icon!("briefcase", "Briefcase", "business", ["briefcase", "work", "job", "business"]),
    icon!("handshake", "Handshake", "business", ["handshake", "deal", "partnership", "agreement"]),
    icon!("laptop", "Laptop", "technology", ["laptop", "computer", "tech", "work"]),
    icon!("smartphone", "Smartphone", "technology", ["smartphone", "mobile", "phone", "device"]),
    icon!("wifi", "WiFi", "technology", ["wifi", "internet", "wireless", "network"]),
    icon!("palette", "Palette", "creative", ["palette", "art", "design", "color"]),
    icon!("camera", "Camera", "creative", ["camera", "photo", "photography", "picture"]),
    icon!("support", "Support", "service", ["support", "help", "service", "headset"]),
    icon!("star", "Star", "service", ["star", "rating", "quality", "favorite"]),
    icon!("car", "Car", "transportation", ["car", "vehicle", "auto", "drive"]),
    icon!("delivery", "Delivery", "transportation", ["delivery", "truck", "shipping", "transport"]),
];

pub fn find(id: &str) -> Option<&'static IconDefinition> {
    ICONS.iter().find(|i| i.id == id)
}

pub fn by_category(category: &str) -> impl Iterator<Item = &'static IconDefinition> + '_ {
    ICONS.iter().filter(move |i| i.category == category)
}

/// Case-insensitive match on name or any keyword, within one category.
/// An empty term returns the whole category.
pub fn search(category: &str, term: &str) -> Vec<&'static IconDefinition> {
    let term = term.trim().to_lowercase();
    by_category(category)
        .filter(|icon| {
            term.is_empty()
                || icon.name.to_lowercase().contains(&term)
                || icon.keywords.iter().any(|k| k.contains(term.as_str()))
        })
        .collect()
}
