use cache_lint::cacheable;

#[cacheable(value = "AuthorCache", key = "#id_author")]
fn get_entity(id: i32) -> Option<i32> {
    Some(id)
}

fn main() {
    let _ = get_entity(1);
}
