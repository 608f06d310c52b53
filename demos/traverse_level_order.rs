use avltree::AvlTree;

fn main() {
    let mut tree = AvlTree::new();
    tree.insert(1, "1");
    tree.insert(2, "2");
    tree.insert(3, "3");
    tree.insert(4, "4");
    tree.insert(5, "5");
    tree.insert(6, "6");

    println!("Level-order view:");
    for (row, slots) in tree.level_view(4).iter().enumerate() {
        print!("{}:", row + 1);
        for slot in slots {
            match slot {
                Some((k, v)) => print!(" {}={}", k, v),
                None => print!(" -"),
            }
        }
        println!();
    }
}
