use dioxus::prelude::*;
use efl_shared::models::Facility;

use crate::api::{self, FacilityFilter};
use crate::components::facility_table::FacilityTable;
use crate::components::filter_selector::FilterSelector;
use crate::components::map_view::FacilityMap;
use crate::map::config::MapConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
enum View {
    Map,
    Table,
}

/// Status of the latest facility request. The views keep drawing the last
/// good list whatever this says.
#[derive(Debug, Clone, PartialEq)]
enum LoadStatus {
    Loading,
    Failed(String),
    Ready,
}

fn load_status(latest: Option<&Result<Vec<Facility>, String>>) -> LoadStatus {
    match latest {
        None => LoadStatus::Loading,
        Some(Err(e)) => LoadStatus::Failed(e.clone()),
        Some(Ok(_)) => LoadStatus::Ready,
    }
}

#[component]
pub fn Home() -> Element {
    let filter = use_signal(FacilityFilter::default);
    let mut facilities = use_signal(Vec::<Facility>::new);
    let mut view = use_signal(|| View::Map);

    let mut facilities_resource = use_resource(move || {
        let filter = filter.read().clone();
        async move { api::fetch_facilities(&filter).await }
    });

    use_effect(move || match &*facilities_resource.read() {
        Some(Ok(list)) => {
            tracing::info!(count = list.len(), "facilities loaded");
            facilities.set(list.clone());
        }
        Some(Err(e)) => tracing::warn!(error = %e, "facility load failed"),
        None => {}
    });

    let status = load_status(facilities_resource.read().as_ref());
    let current_view = *view.read();

    rsx! {
        div { class: "app",
            div { class: "header",
                h1 { "French Language Schools Map" }
                div { class: "view-toggle",
                    button {
                        class: if current_view == View::Map { "active" } else { "" },
                        onclick: move |_| view.set(View::Map),
                        "Map"
                    }
                    button {
                        class: if current_view == View::Table { "active" } else { "" },
                        onclick: move |_| view.set(View::Table),
                        "Table"
                    }
                }
            }

            div { class: "sidebar",
                FilterSelector { filter: filter }
            }

            div { class: "content",
                {
                    match status {
                        LoadStatus::Loading => rsx! {
                            div { class: "status", "Loading facilities…" }
                        },
                        LoadStatus::Failed(message) => rsx! {
                            div { class: "status error",
                                p { "Could not load facilities: {message}" }
                                button { onclick: move |_| facilities_resource.restart(), "Retry" }
                            }
                        },
                        LoadStatus::Ready => rsx! {},
                    }
                }
                // The map stays mounted across reloads and view switches.
                div { class: if current_view == View::Map { "map-view" } else { "map-view hidden" },
                    FacilityMap { facilities: facilities, config: MapConfig::default() }
                }
                if current_view == View::Table {
                    FacilityTable { facilities: facilities }
                }
            }
        }
    }
}
