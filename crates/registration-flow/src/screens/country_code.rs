//! Country code picker: search filtering and selection. Pure; the picked
//! country travels back to phone number entry through the host.

use super::{EventEmitter, StateEmitter};
use crate::event::RegistrationFlowEvent;
use crate::phone::{self, Country};

/// State for the country code picker screen.
#[derive(Debug, Clone, Default)]
pub struct CountryCodeState {
    pub query: String,
    pub country_list: Vec<Country>,
    pub common_country_list: Vec<Country>,
    pub filtered_list: Vec<Country>,
    /// Index to scroll to when the picker opens on a country outside the
    /// common list.
    pub starting_index: usize,
}

impl CountryCodeState {
    /// Load the country tables, positioning the list on the caller's current
    /// country when it is not among the common ones.
    pub fn load(initial: Option<Country>) -> Self {
        let country_list: Vec<Country> = phone::all_countries().to_vec();
        let common_country_list = phone::common_countries();

        let starting_index = match initial {
            Some(country) if !common_country_list.contains(&country) => country_list
                .iter()
                .position(|c| c == &country)
                .map(|index| index + common_country_list.len())
                .unwrap_or(0),
            _ => 0,
        };

        Self {
            query: String::new(),
            country_list,
            common_country_list,
            filtered_list: Vec::new(),
            starting_index,
        }
    }
}

#[derive(Debug, Clone)]
pub enum CountryCodePickerEvent {
    Search(String),
    CountrySelected(Country),
    Dismissed,
}

/// Event handler for the picker. Selection and dismissal both pop the
/// screen; the host forwards the chosen country to phone number entry.
pub struct CountryCodePickerFlow;

impl CountryCodePickerFlow {
    pub fn apply_event(
        &self,
        state: CountryCodeState,
        event: CountryCodePickerEvent,
        emit_state: StateEmitter<'_, CountryCodeState>,
        emit: EventEmitter<'_>,
    ) {
        match event {
            CountryCodePickerEvent::Search(query) => {
                let mut next = state;
                next.filtered_list = phone::search(&query, &next.country_list);
                next.query = query;
                emit_state(next);
            }
            CountryCodePickerEvent::CountrySelected(_) | CountryCodePickerEvent::Dismissed => {
                emit(RegistrationFlowEvent::NavigateBack);
            }
        }
    }
}
