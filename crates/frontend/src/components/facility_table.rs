use dioxus::prelude::*;
use efl_shared::models::Facility;

const PAGE_SIZE: usize = 100;

/// Program column text for a facility.
pub fn program_summary(f: &Facility) -> String {
    let mut programs = Vec::new();
    if f.language_minority_status {
        programs.push("Minority language");
    }
    if f.french_immersion {
        programs.push("Immersion");
    }
    if f.early_immersion {
        programs.push("Early");
    }
    if f.middle_immersion {
        programs.push("Middle");
    }
    if f.late_immersion {
        programs.push("Late");
    }
    if programs.is_empty() {
        "English".to_string()
    } else {
        programs.join(", ")
    }
}

#[component]
pub fn FacilityTable(facilities: ReadSignal<Vec<Facility>>) -> Element {
    let mut shown = use_signal(|| PAGE_SIZE);
    let list = facilities.read();
    let limit = (*shown.read()).min(list.len());

    rsx! {
        div { class: "panel facility-table",
            h3 { "{list.len()} facilities" }
            table {
                thead {
                    tr {
                        th { "Name" }
                        th { "Municipality" }
                        th { "Province" }
                        th { "Type" }
                        th { "Programs" }
                    }
                }
                tbody {
                    for f in list.iter().take(limit) {
                        tr { key: "{f.id}",
                            td { "{f.facility_name}" }
                            td { "{f.municipality()}" }
                            td { {f.province.clone().unwrap_or_default()} }
                            td { {f.facility_type.clone().unwrap_or_default()} }
                            td { {program_summary(f)} }
                        }
                    }
                }
            }
            if limit < list.len() {
                button {
                    class: "secondary",
                    onclick: move |_| {
                        let next = *shown.read() + PAGE_SIZE;
                        shown.set(next);
                    },
                    "Show more"
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_summary() {
        let mut f = Facility::default();
        assert_eq!(program_summary(&f), "English");
        f.french_immersion = true;
        f.late_immersion = true;
        assert_eq!(program_summary(&f), "Immersion, Late");
    }
}
