use avltree::{AvlTree, Shell, TreeError};

fn main() {
    let mut tree = AvlTree::new();
    tree.insert(0, "zero");
    tree.insert(1, "one");
    tree.insert(2, "two");
    tree.insert(2, "two");
    tree.insert(3, "three");
    tree.insert(4, "four");
    tree.insert(5, "five");
    assert_eq!(tree.search(&1), Ok(&"one"));
    assert_eq!(tree.remove(&1), Ok("one"));
    assert_eq!(tree.search(&1), Err(TreeError::NotFound));

    println!("pre-order:  {:?}", tree.pre_order());
    println!("in-order:   {:?}", tree.in_order());
    println!("post-order: {:?}", tree.post_order());

    let mut shell = Shell::new();
    for line in [
        "insert 10 ten",
        "insert 20 twenty",
        "insert 30 thirty",
        "find 20",
        "print 2 rows",
        "remove 40",
    ] {
        println!("> {line}");
        if let Some(output) = shell.run_line(line) {
            println!("{output}");
        }
    }
}
