//! Weighted delivery item table used to name missions.

use depths_core::FloorNumber;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Name shown when the item table cannot produce an entry.
pub const FALLBACK_ITEM_NAME: &str = "!!?@&&???!!";

/// Floor depth at which item weights reach their final values.
const WEIGHT_HORIZON: f32 = 10.0;

/// Deliverable item with a depth-dependent draw weight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemName {
    /// Display name of the item.
    pub name: String,
    /// Draw weight on the first floor.
    pub initial_weight: f32,
    /// Draw weight from the weight horizon onwards.
    pub final_weight: f32,
    /// Smallest quantity before the floor bonus.
    pub min_amount: u32,
    /// Exclusive upper bound of the quantity before the floor bonus.
    pub max_amount: u32,
}

impl ItemName {
    /// Creates an item entry.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        initial_weight: f32,
        final_weight: f32,
        min_amount: u32,
        max_amount: u32,
    ) -> Self {
        Self {
            name: name.into(),
            initial_weight,
            final_weight,
            min_amount,
            max_amount,
        }
    }

    /// Draw weight at `progress`, interpolated and clamped between the two endpoints.
    #[must_use]
    pub fn weight(&self, progress: f32) -> f32 {
        let progress = progress.clamp(0.0, 1.0);
        let weight = self.initial_weight + (self.final_weight - self.initial_weight) * progress;
        let (low, high) = if self.initial_weight < self.final_weight {
            (self.initial_weight, self.final_weight)
        } else {
            (self.final_weight, self.initial_weight)
        };
        weight.clamp(low, high)
    }

    /// Quantity to deliver when the target lies on `floor`.
    ///
    /// Fixed-amount items ignore the floor; ranged items add the floor number
    /// to a draw from `min_amount..max_amount`.
    pub fn quantity<R>(&self, rng: &mut R, floor: FloorNumber) -> u32
    where
        R: Rng + ?Sized,
    {
        if self.min_amount >= self.max_amount {
            return self.min_amount;
        }
        rng.gen_range(self.min_amount..self.max_amount)
            .saturating_add(floor.get())
    }
}

/// Ordered set of deliverable items.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemTable {
    items: Vec<ItemName>,
}

impl ItemTable {
    /// Creates a table from explicit entries.
    #[must_use]
    pub fn new(items: Vec<ItemName>) -> Self {
        Self { items }
    }

    /// Entries in draw order.
    #[must_use]
    pub fn items(&self) -> &[ItemName] {
        &self.items
    }

    /// Draws an item proportionally to its weight at `progress`.
    ///
    /// Returns `None` when the table is empty or every weight is zero.
    pub fn pick<R>(&self, rng: &mut R, progress: f32) -> Option<&ItemName>
    where
        R: Rng + ?Sized,
    {
        let total: f32 = self.items.iter().map(|item| item.weight(progress)).sum();
        if total <= 0.0 {
            return None;
        }

        let mut value = rng.gen::<f32>() * total;
        self.items.iter().find(|item| {
            let weight = item.weight(progress);
            value -= weight;
            weight > 0.0 && value <= 0.0
        })
    }

    /// Draws a mission name such as `"Pizza x3"` for a target on `floor`.
    pub fn mission_name<R>(&self, rng: &mut R, floor: FloorNumber) -> String
    where
        R: Rng + ?Sized,
    {
        let progress = floor.get() as f32 / WEIGHT_HORIZON;
        match self.pick(rng, progress) {
            Some(item) => format!("{} x{}", item.name, item.quantity(rng, floor)),
            None => format!("{FALLBACK_ITEM_NAME} x0"),
        }
    }
}

impl Default for ItemTable {
    fn default() -> Self {
        Self::new(vec![
            ItemName::new("Pizza", 6.0, 1.0, 1, 4),
            ItemName::new("Letter", 5.0, 2.0, 1, 1),
            ItemName::new("Parcel", 4.0, 3.0, 1, 3),
            ItemName::new("Flowers", 3.0, 1.0, 2, 6),
            ItemName::new("Coffee", 3.0, 2.0, 1, 5),
            ItemName::new("Spare Keys", 1.0, 3.0, 1, 1),
            ItemName::new("Lantern Oil", 0.5, 4.0, 1, 3),
            ItemName::new("Rope", 0.5, 3.0, 1, 1),
            ItemName::new("Antidote", 0.0, 3.0, 1, 3),
            ItemName::new("Dragon Egg", 0.0, 1.0, 1, 1),
        ])
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn weight_interpolates_and_clamps() {
        let rising = ItemName::new("Rope", 1.0, 3.0, 1, 1);
        assert_eq!(rising.weight(0.0), 1.0);
        assert_eq!(rising.weight(0.5), 2.0);
        assert_eq!(rising.weight(4.0), 3.0);

        let falling = ItemName::new("Pizza", 6.0, 1.0, 1, 4);
        assert_eq!(falling.weight(1.0), 1.0);
        assert_eq!(falling.weight(-1.0), 6.0);
    }

    #[test]
    fn quantity_adds_floor_only_for_ranged_items() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let fixed = ItemName::new("Letter", 1.0, 1.0, 2, 2);
        let ranged = ItemName::new("Pizza", 1.0, 1.0, 1, 4);

        assert_eq!(fixed.quantity(&mut rng, FloorNumber::new(7)), 2);
        for _ in 0..32 {
            let quantity = ranged.quantity(&mut rng, FloorNumber::new(7));
            assert!((8..11).contains(&quantity), "quantity {quantity}");
        }
    }

    #[test]
    fn zero_weight_items_are_never_drawn() {
        let table = ItemTable::new(vec![
            ItemName::new("Never", 0.0, 0.0, 1, 1),
            ItemName::new("Always", 1.0, 1.0, 1, 1),
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..64 {
            assert_eq!(table.mission_name(&mut rng, FloorNumber::new(0)), "Always x1");
        }
    }

    #[test]
    fn empty_table_falls_back() {
        let table = ItemTable::new(Vec::new());
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(table.pick(&mut rng, 0.0).is_none());
        assert_eq!(
            table.mission_name(&mut rng, FloorNumber::new(2)),
            "!!?@&&???!! x0"
        );
    }
}
