#[cfg(test)]
mod storage_test;
