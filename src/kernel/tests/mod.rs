mod test_memory_basic;
