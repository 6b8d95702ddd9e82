use cache_lint::cache_evict;

#[cache_evict(key = "#id", unless = "#id > 0")]
fn remove(id: u64) -> u64 {
    id
}

fn main() {
    let _ = remove(1);
}
