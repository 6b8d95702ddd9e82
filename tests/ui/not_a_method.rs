use cache_lint::cacheable;

#[cacheable(key = "#id")]
struct Author {
    id: u32,
}

fn main() {
    let author = Author { id: 1 };
    let _ = author.id;
}
