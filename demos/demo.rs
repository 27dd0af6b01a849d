use relq::{Database, EngineConfig, Outcome};

const SALES: &str = "\
saleid|itemid|customerid|storeid|time|qty
36|14|2|38|49|15
784|90|182|97|46|31
801|117|2|43|58|5
905|14|182|97|31|8
1012|90|2|38|12|22
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("In-Memory Relational Engine Demo\n");

    // Work in a scratch directory so relative paths resolve there
    let dir = tempfile::TempDir::new()?;
    std::fs::write(dir.path().join("sales1.txt"), SALES)?;
    let mut db = Database::with_config(EngineConfig::default().with_base_dir(dir.path()));

    let script = [
        "R := inputfromfile(sales1.txt)",
        "R1 := select(R, customerid = 2)",
        "R2 := project(R1, saleid, qty, storeid)",
        "R3 := avg(R1, qty)",
        "R4 := sumgroup(R, qty, storeid)",
        "R5 := movavg(R4, sum(qty), 2)",
        "T := sort(R, qty)",
        "S := join(R1, R4, r1.storeid = r4.storeid)",
        "outputtofile(R2)",
        "outputtofile(S, joined.txt)",
        "showdb",
    ];

    for line in script {
        println!("> {line}");
        match db.execute(line) {
            Ok(Outcome::Report(report)) => print!("{report}"),
            Ok(outcome) => println!("{outcome}"),
            Err(err) => println!("error: {err}"),
        }
    }

    println!("\nTables in database:");
    for table in db.tables() {
        println!("  - {} ({} rows)", table.name, table.row_count());
    }

    println!("\nWritten file:");
    print!("{}", std::fs::read_to_string(dir.path().join("joined.txt"))?);

    Ok(())
}
