use dioxus::prelude::*;
use efl_shared::colors::ColorBand;

/// Colour key for the French-program choropleth.
#[component]
pub fn Legend() -> Element {
    rsx! {
        div { class: "map-legend",
            h4 { "French programs" }
            for band in ColorBand::ALL {
                div { class: "legend-row",
                    span {
                        class: "legend-swatch",
                        style: "background: {band.color()};",
                    }
                    span { "{band.label()}" }
                }
            }
        }
    }
}
