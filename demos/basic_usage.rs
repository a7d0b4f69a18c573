//! Basic usage of byte-trie.

use byte_trie::{ByteTrie, Page};

fn main() {
    let mut trie = ByteTrie::new();

    trie.insert(b"table2#test1", "Hello");
    trie.insert(b"table2#test2", "World");
    trie.insert(b"table3#test2", "X");

    println!("table2#test1 = {:?}", trie.lookup(b"table2#test1"));
    println!("table9#test1 = {:?}", trie.lookup(b"table9#test1"));
    println!("Keys: {}, nodes: {}\n", trie.len(), trie.count());

    println!("Range table2..table3:");
    for (key, value) in trie.range(b"table2", b"table3") {
        println!("  {} -> {}", String::from_utf8_lossy(&key), value);
    }

    println!("\nPrefix table, two per page:");
    let mut offset: Option<Vec<u8>> = None;
    let mut n = 1;
    loop {
        let mut page = Page::first(2);
        page.offset = offset.as_deref();
        let results = trie.prefix_page(b"table", page);
        let Some(last) = results.keys().next_back().cloned() else {
            break;
        };
        for (key, value) in &results {
            println!("  page {n}: {} -> {}", String::from_utf8_lossy(key), value);
        }
        offset = Some(last);
        n += 1;
    }

    println!("\nAll entries: {:?}", trie);
}
