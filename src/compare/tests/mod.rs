mod test_histogram_basic;
mod test_search_basic;
