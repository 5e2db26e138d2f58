pub mod item_bills;
