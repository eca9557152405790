//! Fuzz target: `Catalog::from_json`
//!
//! Arbitrary bytes as catalog JSON.  Invariants checked:
//! - No panics under any input
//! - An accepted catalog has unique ids and every recipe item names a
//!   catalog ingredient
//!
//! cargo fuzz run fuzz_catalog_json

#![no_main]

use std::collections::HashSet;

use cocktailbot::catalog::Catalog;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(catalog) = Catalog::from_json(json) else {
        return;
    };

    let ingredients: HashSet<&str> = catalog.ingredients().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ingredients.len(), catalog.ingredients().len());
    for cocktail in catalog.cocktails() {
        for item in &cocktail.recipe {
            assert!(ingredients.contains(item.ingredient_id.as_str()));
        }
    }
});
