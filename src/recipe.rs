//! Recipe model and proportional scaler.
//!
//! A cocktail recipe is an ordered list of [`RecipeItem`]s.  Automatic
//! items are pumped by the machine; manual items are added by the
//! operator following a textual instruction.
//!
//! [`scale`] resizes a whole recipe to a target serving size with one
//! shared factor derived from the combined total of both item kinds, so
//! the drink keeps its proportions.  Each amount is rounded half away
//! from zero to whole millilitres.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

/// Immutable ingredient reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub alcoholic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Dispensed by a pump, inventory-gated.
    #[default]
    Automatic,
    /// Added by hand per `instruction`, never pumped.
    Manual,
}

/// One line of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeItem {
    pub ingredient_id: String,
    /// Amount in mL.
    pub amount_ml: u32,
    #[serde(default)]
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
}

impl RecipeItem {
    pub fn automatic(ingredient_id: impl Into<String>, amount_ml: u32) -> Self {
        Self {
            ingredient_id: ingredient_id.into(),
            amount_ml,
            kind: ItemKind::Automatic,
            instruction: None,
        }
    }

    pub fn manual(
        ingredient_id: impl Into<String>,
        amount_ml: u32,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            ingredient_id: ingredient_id.into(),
            amount_ml,
            kind: ItemKind::Manual,
            instruction: Some(instruction.into()),
        }
    }

    pub fn is_automatic(&self) -> bool {
        self.kind == ItemKind::Automatic
    }
}

/// A cocktail as read from the recipe catalog.  The engine never edits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cocktail {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub alcoholic: bool,
    pub recipe: Vec<RecipeItem>,
}

impl Cocktail {
    /// Display lines for the recipe, e.g. `"40ml Vodka"` or
    /// `"20ml Soda (manual: top up)"`.
    ///
    /// `name_of` resolves an ingredient id to its display name; unknown ids
    /// are shown verbatim.
    pub fn display_summary<'a>(&'a self, name_of: impl Fn(&str) -> Option<&'a str>) -> Vec<String> {
        self.recipe
            .iter()
            .map(|item| {
                let name = name_of(&item.ingredient_id).unwrap_or(&item.ingredient_id);
                match (&item.kind, &item.instruction) {
                    (ItemKind::Manual, Some(how)) => {
                        format!("{}ml {} (manual: {})", item.amount_ml, name, how)
                    }
                    (ItemKind::Manual, None) => format!("{}ml {} (manual)", item.amount_ml, name),
                    (ItemKind::Automatic, _) => format!("{}ml {}", item.amount_ml, name),
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Scaler
// ---------------------------------------------------------------------------

/// A recipe resized to a target serving.  Order, kind and instructions are
/// preserved; only amounts change.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledRecipe {
    pub target_ml: u32,
    pub scale_factor: f64,
    pub items: Vec<RecipeItem>,
}

impl ScaledRecipe {
    /// Automatic items in recipe order.
    pub fn automatic(&self) -> impl Iterator<Item = &RecipeItem> {
        self.items.iter().filter(|i| i.is_automatic())
    }

    /// Manual items in recipe order.
    pub fn manual(&self) -> impl Iterator<Item = &RecipeItem> {
        self.items.iter().filter(|i| !i.is_automatic())
    }

    pub fn total_automatic_ml(&self) -> u32 {
        self.automatic().map(|i| i.amount_ml).sum()
    }

    pub fn has_automatic(&self) -> bool {
        self.items.iter().any(RecipeItem::is_automatic)
    }
}

/// Scale `items` so their amounts add up to (approximately) `target_ml`.
///
/// Returns [`ValidationError::ZeroTotalVolume`] when the recipe has items
/// whose amounts sum to zero.  An empty recipe scales to an empty recipe.
pub fn scale(items: &[RecipeItem], target_ml: u32) -> Result<ScaledRecipe, ValidationError> {
    let total: u64 = items.iter().map(|i| u64::from(i.amount_ml)).sum();
    if total == 0 {
        if items.is_empty() {
            return Ok(ScaledRecipe {
                target_ml,
                scale_factor: 1.0,
                items: Vec::new(),
            });
        }
        return Err(ValidationError::ZeroTotalVolume);
    }

    let factor = f64::from(target_ml) / total as f64;
    let items = items
        .iter()
        .map(|item| RecipeItem {
            // f64::round rounds half away from zero.
            amount_ml: (f64::from(item.amount_ml) * factor).round() as u32,
            ..item.clone()
        })
        .collect();

    Ok(ScaledRecipe {
        target_ml,
        scale_factor: factor,
        items,
    })
}
