use crate::types::{Level, OrderId, RestingOrder, Side};
use std::collections::{BTreeMap, HashMap, VecDeque};

// One side of a book: price levels in a BTreeMap, FIFO queue per level.
// Best is the back of the map for bids (highest price) and the front for
// asks (lowest price). An id -> price index makes cancellation a level
// lookup instead of a scan over every queue.
pub struct PriceLevels {
    side: Side,
    levels: BTreeMap<i64, VecDeque<RestingOrder>>,
    index: HashMap<OrderId, i64>,
}

impl PriceLevels {
    /// Creates empty price levels for the given side.
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Number of resting orders across all levels.
    pub fn len(&self) -> usize {
        self.levels.values().map(|q| q.len()).sum()
    }

    /// Adds an order at its price level, keeping FIFO intact.
    /// Creates the price level if it does not exist yet.
    pub fn push(&mut self, order: RestingOrder) {
        debug_assert!(order.remaining > 0, "resting order must have open quantity");
        self.index.insert(order.id, order.price);
        self.levels.entry(order.price).or_default().push_back(order);
    }

    /// Removes a resting order by id. Returns whether a removal occurred.
    pub fn remove(&mut self, id: OrderId) -> bool {
        let Some(price) = self.index.remove(&id) else {
            return false;
        };
        let Some(queue) = self.levels.get_mut(&price) else {
            return false;
        };
        let Some(position) = queue.iter().position(|o| o.id == id) else {
            return false;
        };
        queue.remove(position);
        if queue.is_empty() {
            self.levels.remove(&price);
        }
        true
    }

    /// Best price on this side, if any orders rest.
    pub fn best_price(&self) -> Option<i64> {
        match self.side {
            Side::Buy => self.levels.keys().next_back().copied(),
            Side::Sell => self.levels.keys().next().copied(),
        }
    }

    /// Head of the side queue: first order at the best price.
    pub fn peek_best(&self) -> Option<&RestingOrder> {
        let best = self.best_price()?;
        self.levels.get(&best)?.front()
    }

    /// Consumes quantity from the head of the best level. The head is popped
    /// when its remaining reaches zero, and the level dropped when empty.
    ///
    /// Returns false if the head does not match the expected order id - the
    /// fill being applied was computed against a different book state.
    pub fn fill_best(&mut self, id: OrderId, quantity: i64) -> bool {
        let Some(price) = self.best_price() else {
            return false;
        };
        let Some(queue) = self.levels.get_mut(&price) else {
            return false;
        };
        let Some(front) = queue.front_mut() else {
            return false;
        };
        if front.id != id || front.remaining < quantity {
            return false;
        }
        front.remaining -= quantity;
        if front.remaining == 0 {
            queue.pop_front();
            self.index.remove(&id);
            if queue.is_empty() {
                self.levels.remove(&price);
            }
        }
        true
    }

    /// Walks resting orders in priority order: best price first, FIFO within
    /// a level. Does not mutate.
    pub fn iter_best_first(&self) -> Box<dyn Iterator<Item = &RestingOrder> + '_> {
        match self.side {
            Side::Buy => Box::new(self.levels.values().rev().flat_map(|q| q.iter())),
            Side::Sell => Box::new(self.levels.values().flat_map(|q| q.iter())),
        }
    }

    /// Aggregates resting quantity per price, best level first.
    pub fn levels_best_first(&self) -> Vec<Level> {
        let entries: Box<dyn Iterator<Item = (&i64, &VecDeque<RestingOrder>)>> = match self.side {
            Side::Buy => Box::new(self.levels.iter().rev()),
            Side::Sell => Box::new(self.levels.iter()),
        };
        entries
            .map(|(price, queue)| Level {
                price: *price,
                quantity: queue.iter().map(|o| o.remaining).sum(),
                orders: queue.len(),
            })
            .collect()
    }

    /// Total resting quantity on this side.
    pub fn total_quantity(&self) -> i64 {
        self.levels
            .values()
            .flat_map(|q| q.iter())
            .map(|o| o.remaining)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn resting(id: i64, price: i64, remaining: i64, ts: i64) -> RestingOrder {
        RestingOrder {
            id: OrderId(id),
            price,
            remaining,
            created_at: Utc.timestamp_opt(1_700_000_000 + ts, 0).unwrap(),
        }
    }

    #[test]
    fn push_keeps_fifo_within_a_level() {
        let mut bids = PriceLevels::new(Side::Buy);
        bids.push(resting(1, 100, 10, 1));
        bids.push(resting(2, 100, 20, 2));
        bids.push(resting(3, 100, 30, 3));

        let ids: Vec<i64> = bids.iter_best_first().map(|o| o.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3], "FIFO must be preserved at a single price");
    }

    #[test]
    fn best_price_depends_on_side() {
        let mut bids = PriceLevels::new(Side::Buy);
        bids.push(resting(1, 100, 10, 1));
        bids.push(resting(2, 105, 10, 2));
        assert_eq!(bids.best_price(), Some(105));

        let mut asks = PriceLevels::new(Side::Sell);
        asks.push(resting(3, 100, 10, 1));
        asks.push(resting(4, 105, 10, 2));
        assert_eq!(asks.best_price(), Some(100));
    }

    #[test]
    fn iter_best_first_crosses_levels_in_priority_order() {
        let mut asks = PriceLevels::new(Side::Sell);
        asks.push(resting(1, 102, 5, 3));
        asks.push(resting(2, 100, 5, 1));
        asks.push(resting(3, 101, 5, 2));

        let prices: Vec<i64> = asks.iter_best_first().map(|o| o.price).collect();
        assert_eq!(prices, vec![100, 101, 102]);
    }

    #[test]
    fn remove_by_id_drops_empty_levels() {
        let mut bids = PriceLevels::new(Side::Buy);
        bids.push(resting(1, 100, 10, 1));
        bids.push(resting(2, 101, 10, 2));

        assert!(bids.remove(OrderId(2)));
        assert_eq!(bids.best_price(), Some(100));
        assert!(!bids.remove(OrderId(2)), "second removal is a no-op");
        assert_eq!(bids.len(), 1);
    }

    #[test]
    fn fill_best_pops_exhausted_heads() {
        let mut asks = PriceLevels::new(Side::Sell);
        asks.push(resting(1, 100, 5, 1));
        asks.push(resting(2, 100, 5, 2));

        assert!(asks.fill_best(OrderId(1), 3));
        assert_eq!(asks.peek_best().map(|o| (o.id, o.remaining)), Some((OrderId(1), 2)));

        assert!(asks.fill_best(OrderId(1), 2));
        assert_eq!(asks.peek_best().map(|o| o.id), Some(OrderId(2)));
        assert_eq!(asks.len(), 1);
    }

    #[test]
    fn fill_best_rejects_stale_fills() {
        let mut asks = PriceLevels::new(Side::Sell);
        asks.push(resting(1, 100, 5, 1));
        assert!(!asks.fill_best(OrderId(9), 5));
        assert_eq!(asks.len(), 1);
    }

    #[test]
    fn levels_aggregate_remaining_and_counts() {
        let mut bids = PriceLevels::new(Side::Buy);
        bids.push(resting(1, 100, 10, 1));
        bids.push(resting(2, 100, 5, 2));
        bids.push(resting(3, 99, 7, 3));

        let levels = bids.levels_best_first();
        assert_eq!(
            levels,
            vec![
                Level { price: 100, quantity: 15, orders: 2 },
                Level { price: 99, quantity: 7, orders: 1 },
            ]
        );
        assert_eq!(bids.total_quantity(), 22);
    }
}
