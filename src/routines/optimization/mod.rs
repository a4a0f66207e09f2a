pub mod line_search;
