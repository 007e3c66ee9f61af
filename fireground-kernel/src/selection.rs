/**
 * SÉLECTION - Élément courant du dashboard
 *
 * RÔLE : Un pompier OU une balise sélectionné, jamais les deux.
 * Choisir l'un efface l'autre ; None ne vide que son propre type.
 */

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    None,
    Firefighter(String),
    Beacon(String),
}

impl Selection {
    /// Some(id) remplace toute sélection ; None ne vide que la sélection pompier
    pub fn select_firefighter(&mut self, id: Option<String>) {
        match id {
            Some(id) => *self = Selection::Firefighter(id),
            None => {
                if matches!(self, Selection::Firefighter(_)) {
                    *self = Selection::None;
                }
            }
        }
    }

    pub fn select_beacon(&mut self, id: Option<String>) {
        match id {
            Some(id) => *self = Selection::Beacon(id),
            None => {
                if matches!(self, Selection::Beacon(_)) {
                    *self = Selection::None;
                }
            }
        }
    }

    pub fn firefighter_id(&self) -> Option<&str> {
        match self {
            Selection::Firefighter(id) => Some(id),
            _ => None,
        }
    }

    pub fn beacon_id(&self) -> Option<&str> {
        match self {
            Selection::Beacon(id) => Some(id),
            _ => None,
        }
    }

    pub fn view(&self) -> SelectionView {
        SelectionView {
            firefighter_id: self.firefighter_id().map(str::to_string),
            beacon_id: self.beacon_id().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionView {
    pub firefighter_id: Option<String>,
    pub beacon_id: Option<String>,
}
