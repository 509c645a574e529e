use dioxus::prelude::*;

use crate::api::FacilityFilter;

/// Encode a filter as one `<select>` value, `kind:argument`.
pub fn filter_value(filter: &FacilityFilter) -> String {
    match filter {
        FacilityFilter::All => "all".to_string(),
        FacilityFilter::FrenchImmersion => "french-immersion".to_string(),
        FacilityFilter::Province(p) => format!("province:{p}"),
        FacilityFilter::Municipality(m) => format!("municipality:{m}"),
        FacilityFilter::FacilityType(t) => format!("type:{t}"),
    }
}

pub fn parse_filter_value(value: &str) -> FacilityFilter {
    match value.split_once(':') {
        Some(("province", p)) => FacilityFilter::Province(p.to_string()),
        Some(("municipality", m)) => FacilityFilter::Municipality(m.to_string()),
        Some(("type", t)) => FacilityFilter::FacilityType(t.to_string()),
        _ if value == "french-immersion" => FacilityFilter::FrenchImmersion,
        _ => FacilityFilter::All,
    }
}

#[component]
pub fn FilterSelector(filter: Signal<FacilityFilter>) -> Element {
    let current = filter_value(&filter.read());

    rsx! {
        div { class: "panel",
            h3 { "Facilities" }
            select {
                "aria-label": "Filter facilities",
                value: "{current}",
                onchange: move |evt: Event<FormData>| {
                    filter.set(parse_filter_value(&evt.value()));
                },
                option { value: "all", "All facilities" }
                option { value: "french-immersion", "French immersion only" }
                optgroup { label: "Province",
                    for code in efl_shared::models::PROVINCE_CODES {
                        option {
                            value: "province:{code}",
                            selected: current == format!("province:{code}"),
                            "{code}"
                        }
                    }
                }
            }
        }
    }
}
