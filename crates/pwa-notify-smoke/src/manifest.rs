//! Web app manifest model, with the demo's installable metadata.

use serde::Serialize;

/// An installable icon entry.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestIcon {
    pub src: String,
    pub sizes: String,
    #[serde(rename = "type")]
    pub icon_type: String,
    pub purpose: String,
}

/// The web app manifest served at `/manifest.webmanifest`.
#[derive(Debug, Clone, Serialize)]
pub struct WebManifest {
    pub name: String,
    pub short_name: String,
    pub description: String,
    pub start_url: String,
    pub scope: String,
    pub display: String,
    pub background_color: String,
    pub theme_color: String,
    pub icons: Vec<ManifestIcon>,
    pub orientation: String,
    pub lang: String,
    pub dir: String,
}

/// The demo application's manifest.
pub fn demo_manifest() -> WebManifest {
    WebManifest {
        name: "Next PWA Notifications".to_string(),
        short_name: "PWA Notify".to_string(),
        description: "Progressive Web App demo showing how to register a service worker \
                      and trigger multiple notification styles."
            .to_string(),
        start_url: "/".to_string(),
        scope: "/".to_string(),
        display: "standalone".to_string(),
        background_color: "#0b122f".to_string(),
        theme_color: "#405cff".to_string(),
        icons: vec![
            ManifestIcon {
                src: "/icon-192.png".to_string(),
                sizes: "192x192".to_string(),
                icon_type: "image/png".to_string(),
                purpose: "maskable".to_string(),
            },
            ManifestIcon {
                src: "/icon-512.png".to_string(),
                sizes: "512x512".to_string(),
                icon_type: "image/png".to_string(),
                purpose: "maskable".to_string(),
            },
        ],
        orientation: "portrait".to_string(),
        lang: "th".to_string(),
        dir: "auto".to_string(),
    }
}
